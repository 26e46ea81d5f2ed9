// Each subcommand lives in its own module.

pub mod add;
pub mod calendar;
pub mod materialize;
pub mod r#move;
pub mod preview;
pub mod record;
pub mod settle;
pub mod stop;
pub mod templates;
