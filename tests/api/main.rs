mod diagnostics;
mod helpers;
mod tees;
