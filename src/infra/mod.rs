pub mod pota;
