mod delegation;
mod helpers;
