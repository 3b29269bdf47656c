mod common;
mod dispatch;
mod tracker;
