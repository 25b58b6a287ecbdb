mod fixtures;
pub use fixtures::*;

// 测试中常用的类型
pub use paru::{
  compare::{ComparisonOutcome, Verdict},
  model::{Confidence, DetectItem, DetectResult, Model},
  output::{OutputWrapper, Render, TextReport},
  task::{CompareTask, OneShotTask, Task},
};
