pub mod interceptor;
pub mod seed;
pub mod updater;

pub use interceptor::intercept;
pub use seed::insert;
pub use updater::update;
