mod network;
mod scenarios;
