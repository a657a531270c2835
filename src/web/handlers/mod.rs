pub mod analysis_handlers;
pub mod campaign_handlers;
pub mod persona_handlers;
pub mod system_handlers;
pub mod user_handlers;

pub use analysis_handlers::*;
pub use campaign_handlers::*;
pub use persona_handlers::*;
pub use system_handlers::*;
pub use user_handlers::*;
