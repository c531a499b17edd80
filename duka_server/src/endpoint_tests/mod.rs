mod auth;
mod callbacks;
mod catalog;
mod helpers;
mod mocks;
mod payments;
