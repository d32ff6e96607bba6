pub mod record;
pub mod slot;

pub use record::CallRecord;
pub use slot::{NumericAnswer, SlotSet, SlotUpdate, SlotValue};
