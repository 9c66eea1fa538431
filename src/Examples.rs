/// in-memory runs and a case-directory run of the VOF solver
pub mod vof_examples;
