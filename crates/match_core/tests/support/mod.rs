#![allow(dead_code)]

pub mod zones;
