mod common;

mod applications;
mod engagement;
mod matching;
mod outreach;
