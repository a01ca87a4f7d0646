pub mod alignment;
pub mod dashboard;

pub use alignment::align;
pub use dashboard::{DashboardService, HourlyChart, Outlook, WeeklyChart};
