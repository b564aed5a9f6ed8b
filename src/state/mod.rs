pub mod link_store;

pub use link_store::{
    create_shared_link_store, Link, LinkStore, LinkedBy, SharedLinkStore,
};
