pub mod enable;
pub mod item_type;
pub mod questionnaire;

pub use enable::{EnableBehavior, EnableOperator, EnableWhen};
pub use item_type::ItemType;
pub use questionnaire::{AnswerOption, Item, Questionnaire};
