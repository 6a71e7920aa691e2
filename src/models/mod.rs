pub mod fee_record;
pub mod block_bookmark;
pub mod fee_query;

pub use fee_record::*;
pub use block_bookmark::*;
pub use fee_query::*;
