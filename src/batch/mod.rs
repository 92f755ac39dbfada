//! 批量分类模块：记录读写、分桶、并发扇出
pub mod record;
pub mod orchestrator;
pub mod io;

pub use self::record::{BatchStats, CategorizedBatch, Record, SkippedRecord};
pub use self::orchestrator::BatchOrchestrator;
pub use self::io::{read_records, write_partitioned};
