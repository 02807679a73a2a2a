/// microk8s operations through the snap wrappers
pub mod addons;
pub mod client;
pub mod nodes;
pub mod pods;

pub use client::Microk8s;
pub use pods::{ContainerState, PodStateQuery};
