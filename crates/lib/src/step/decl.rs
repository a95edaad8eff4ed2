use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::execute::cmd::ToolSpec;
use crate::step::{BuildStep, Exec, Images, Scripts, StaticDir, Styles, Templates};

/// A step as declared by the step script, before it is turned into a runnable
/// [`BuildStep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDecl {
  StaticDir {
    name: String,
  },
  Images {
    dir: String,
    tool: Option<ToolSpec>,
  },
  Sass {
    dir: String,
    include: Vec<PathBuf>,
    tool: Option<ToolSpec>,
    post: Option<Vec<ToolSpec>>,
  },
  Templates {
    dir: String,
    tool: Option<ToolSpec>,
  },
  Js {
    out: String,
    files: Vec<String>,
    /// `Some(None)` disables minification.
    minifier: Option<Option<ToolSpec>>,
  },
  Exec {
    name: String,
    program: String,
    args: Vec<String>,
    outputs: BTreeMap<String, PathBuf>,
  },
}

impl StepDecl {
  /// Whether this declaration handles the asset directory `dir`.
  pub fn covers_dir(&self, dir: &str) -> bool {
    match self {
      StepDecl::StaticDir { name } => name == dir,
      StepDecl::Images { dir: d, .. } | StepDecl::Sass { dir: d, .. } | StepDecl::Templates { dir: d, .. } => {
        d == dir
      }
      StepDecl::Js { .. } | StepDecl::Exec { .. } => false,
    }
  }

  pub fn into_step(self) -> Box<dyn BuildStep> {
    match self {
      StepDecl::StaticDir { name } => Box::new(StaticDir::new(name)),
      StepDecl::Images { dir, tool } => {
        let step = Images::new(dir);
        Box::new(match tool {
          Some(tool) => step.with_tool(tool),
          None => step,
        })
      }
      StepDecl::Sass {
        dir,
        include,
        tool,
        post,
      } => {
        let mut step = Styles::new(dir).include(include);
        if let Some(tool) = tool {
          step = step.with_tool(tool);
        }
        if let Some(post) = post {
          step = step.with_post(post);
        }
        Box::new(step)
      }
      StepDecl::Templates { dir, tool } => {
        let step = Templates::new(dir);
        Box::new(match tool {
          Some(tool) => step.with_tool(tool),
          None => step,
        })
      }
      StepDecl::Js { out, files, minifier } => {
        let step = Scripts::new(out, files);
        Box::new(match minifier {
          Some(minifier) => step.with_minifier(minifier),
          None => step,
        })
      }
      StepDecl::Exec {
        name,
        program,
        args,
        outputs,
      } => Box::new(
        outputs
          .into_iter()
          .fold(Exec::new(name, program).args(args), |step, (logical, path)| {
            step.output(logical, path)
          }),
      ),
    }
  }
}
