pub mod location_keys;
