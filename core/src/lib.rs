pub mod context;
pub mod dump;
pub mod error;
pub mod label;
pub mod op;
pub mod opcode;
pub mod temp;
pub mod types;

pub use context::Context;
pub use error::ContextError;
pub use label::Label;
pub use op::{CallData, CallFlags, Op, OpIdx, MAX_OP_ARGS};
pub use opcode::{OpDef, OpFlags, Opcode, OPCODE_DEFS};
pub use temp::{Temp, TempIdx};
pub use types::{Cond, Type};
