pub mod guard;

pub use guard::ConcurrencyGuard;
