//! A navigation bar of cities that shows the live local time in whichever
//! city is selected, with an indicator that slides under the active item.

pub mod app;
pub mod city;
pub mod config;
pub mod nav;
pub mod session;
pub mod state;
pub mod surface;
pub mod terminal;
pub mod time_api;
pub mod timer;
