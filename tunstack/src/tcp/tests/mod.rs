mod common;

mod transfer;
