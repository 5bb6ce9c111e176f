pub mod capture_engine;
