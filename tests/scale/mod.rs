//! Scale and status scenarios driven through scripted fleet and pool doubles.

mod bdd_steps;
mod scenarios;
mod test_helpers;
