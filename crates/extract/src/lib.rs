mod consts;
pub mod error;
mod extract;
pub mod models;

pub use crate::consts::{BLOCK_SCRIPT_PATH, WRAPPER_SUFFIX};
pub use crate::extract::{extract, is_block_script};
pub use crate::models::{BlockMap, BlockMapEntry, ClassSignature, ShardIndex, SignatureHash};
