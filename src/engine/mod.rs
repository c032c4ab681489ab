// Trading engine: scan/exit loops, position book, performance tracking
pub mod bot;
pub mod clock;
pub mod performance;
pub mod positions;

pub use bot::{ScanOutcome, StartStatus, StopStatus, SymbolScan, TradingBot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use performance::PerformanceTracker;
pub use positions::PositionBook;
