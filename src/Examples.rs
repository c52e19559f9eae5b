/// hydrogen ionization balance solved on a temperature grid, one Newton instance per temperature
pub mod ionization_balance;
/// runnable demos of the Newton solver, chosen by task number
pub mod rootsolve_examples;
