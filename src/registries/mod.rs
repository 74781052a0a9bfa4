mod template_registry;

pub use template_registry::TemplateRegistry;
