mod entry;
mod map;
mod signature;

pub use self::entry::BlockMapEntry;
pub use self::map::{BlockMap, ShardIndex};
pub use self::signature::{ClassSignature, SignatureHash};
