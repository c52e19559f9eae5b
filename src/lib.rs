#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Numerics;
#[allow(non_snake_case)]
pub mod Utils;
