mod assignment;
mod common;
mod deliverable;
