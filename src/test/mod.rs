mod clock;
mod config;
mod generator;
mod network_integration;
