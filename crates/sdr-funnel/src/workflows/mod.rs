pub mod funnel;
pub mod hubspot;
pub mod publish;
