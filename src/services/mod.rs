pub mod pota_api;
