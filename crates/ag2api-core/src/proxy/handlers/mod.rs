// Handlers module - response-out glue between upstream and client

pub mod claude;
