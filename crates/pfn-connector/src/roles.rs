use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;

use pfn_node::Node;
use pfn_student::{
    GradeCalculator, GraderFactory, GradingHandler, PlainStudentFileHandler, StudentDataItem,
    StudentHandler, StudentInputHandler, StudentNetOutputHandler, StudentWriterHandler,
};

/// The nodes of the student pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Reads basic student info from file and sends it on
    BasicInfo,
    /// Merges received students with a local data file
    Merge,
    /// Merges, grades and writes out the results
    Grading,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::BasicInfo => "basic-info",
            Role::Merge => "merge",
            Role::Grading => "grading",
        }
    }

    /// `~/.pfn/<role>.toml`
    pub fn default_config_path(&self) -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(home.join(".pfn").join(format!("{}.toml", self.as_str())))
    }

    /// Add this role's handlers to `node`.
    pub fn assemble(&self, node: &Node<StudentDataItem>, grader: Option<&str>) -> anyhow::Result<()> {
        match self {
            Role::BasicInfo => {
                node.add_handler(Arc::new(PlainStudentFileHandler::new(node.handle())));
                node.add_handler(Arc::new(StudentNetOutputHandler::new()));
            }
            Role::Merge => {
                node.add_handler(Arc::new(StudentInputHandler::new()));
                node.add_handler(Arc::new(StudentHandler::new(node.handle())));
                node.add_handler(Arc::new(StudentNetOutputHandler::new()));
            }
            Role::Grading => {
                let calculator: Box<dyn GradeCalculator> = match grader {
                    Some(name) => GraderFactory::by_name(name)?,
                    None => GraderFactory::make_grader(),
                };
                node.add_handler(Arc::new(StudentInputHandler::new()));
                node.add_handler(Arc::new(StudentHandler::new(node.handle())));
                node.add_handler(Arc::new(GradingHandler::new(calculator)));
                node.add_handler(Arc::new(StudentWriterHandler::new(node.handle())));
                node.add_handler(Arc::new(StudentNetOutputHandler::new()));
            }
        }
        Ok(())
    }
}
