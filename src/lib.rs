#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod FiniteVolume;
#[allow(non_snake_case)]
pub mod Models;
#[allow(non_snake_case)]
pub mod Utils;
#[allow(non_snake_case)]
pub mod VoF;
