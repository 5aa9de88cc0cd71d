pub mod izhikevich;

pub use izhikevich::{Izhikevich, IzhikevichParams};
