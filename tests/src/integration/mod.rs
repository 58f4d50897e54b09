mod cli;
mod discovery;
mod transfer;
