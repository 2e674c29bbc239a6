//! FSM hints persisted in the coordination tree.
//!
//! Each shard's hints live at `<root>/hints/shard-NNN` as JSON. A shard with
//! no stored hints starts from initial hints naming its recovery log.

mod fsm;
mod persist;

pub use fsm::{Fnode, FsmHints, RecorderRange};
pub use persist::{
    hints_path, load_hints, spawn_store_hints, store_hints, HintsWriter, HINTS_DIR,
};
