use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Generated,
    Skipped,
    Failed,
}

pub struct ProgressIndicator {
    total: usize,
    generated: usize,
    skipped: usize,
    failed: usize,
    start_time: Instant,
}

impl ProgressIndicator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            generated: 0,
            skipped: 0,
            failed: 0,
            start_time: Instant::now(),
        }
    }

    pub fn start_item(&self, name: &str) {
        println!("Processing: {} ({}/{})", name, self.processed() + 1, self.total);
    }

    pub fn complete_item(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Generated => self.generated += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    fn processed(&self) -> usize {
        self.generated + self.skipped + self.failed
    }

    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        println!("\n{}", "=".repeat(60));
        println!("Summary:");
        println!("  Total:     {}", self.total);
        println!("  Generated: {}", self.generated);
        println!("  Skipped:   {}", self.skipped);
        println!("  Failed:    {}", self.failed);
        println!("  Duration:  {:.2}s", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
    }
}
