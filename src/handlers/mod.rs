// Route handlers, grouped by the product area they serve.
//
// Every module except `service` runs behind the session layer; the few
// routes that also serve anonymous users take `MaybeSession` instead.
pub mod account;
pub mod chat;
pub mod profile;
pub mod proxy;
pub mod research;
pub mod service;
pub mod sources;
