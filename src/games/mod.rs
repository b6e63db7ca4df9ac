pub mod common;
pub mod dictation;
pub mod hangman;
pub mod matching;
pub mod quiz;
pub mod sentence_builder;
