pub mod near_models;
pub mod near_rpc;
pub mod provider_pool;

#[cfg(test)]
pub(crate) mod testing;
