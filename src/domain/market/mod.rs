pub mod calendar;
pub mod quotes;
pub mod trading_day;

pub use calendar::MarketCalendar;
pub use trading_day::TradingDay;
