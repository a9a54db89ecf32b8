mod context;
mod op;
mod types;
