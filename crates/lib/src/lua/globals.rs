//! The `assets` global table.
//!
//! - `assets.wd` - Canonical working directory
//! - `assets.dir` - Assets directory
//! - `assets.static_dir(name)` - Pack `assets/<name>` as-is
//! - `assets.images{ dir, tool }` - Optimize and pack images
//! - `assets.sass{ dir, include, tool, post }` - Compile stylesheets
//! - `assets.templates{ dir, tool }` - Minify HTML templates
//! - `assets.js(out, { files... }, { minify })` - Concatenate scripts
//! - `assets.exec{ name, cmd, args, outputs }` - Run a tool and pack its outputs
//!
//! Each function only records a [`StepDecl`]; nothing runs during evaluation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use mlua::prelude::*;

use crate::config::BuildConfig;
use crate::consts::{IMAGES_DIR, SASS_DIR, TEMPLATES_DIR};
use crate::execute::cmd::ToolSpec;
use crate::step::StepDecl;

pub type Steps = Rc<RefCell<Vec<StepDecl>>>;

/// Register the `assets` global table in the Lua runtime.
pub fn register_globals(lua: &Lua, config: &BuildConfig, steps: Steps) -> LuaResult<()> {
  let assets = lua.create_table()?;

  assets.set("wd", config.wd.to_string_lossy().to_string())?;
  assets.set("dir", config.assets.to_string_lossy().to_string())?;

  let s = steps.clone();
  assets.set(
    "static_dir",
    lua.create_function(move |_, name: String| {
      s.borrow_mut().push(StepDecl::StaticDir { name });
      Ok(())
    })?,
  )?;

  let s = steps.clone();
  assets.set(
    "images",
    lua.create_function(move |_, opts: Option<LuaTable>| {
      let (dir, tool) = match opts {
        Some(t) => (
          t.get::<Option<String>>("dir")?.unwrap_or_else(|| IMAGES_DIR.to_string()),
          parse_opt_tool(t.get("tool")?)?,
        ),
        None => (IMAGES_DIR.to_string(), None),
      };
      s.borrow_mut().push(StepDecl::Images { dir, tool });
      Ok(())
    })?,
  )?;

  let s = steps.clone();
  assets.set(
    "sass",
    lua.create_function(move |_, opts: Option<LuaTable>| {
      let decl = match opts {
        Some(t) => StepDecl::Sass {
          dir: t.get::<Option<String>>("dir")?.unwrap_or_else(|| SASS_DIR.to_string()),
          include: string_list(t.get("include")?, "sass include")?
            .into_iter()
            .map(PathBuf::from)
            .collect(),
          tool: parse_opt_tool(t.get("tool")?)?,
          post: match t.get::<LuaValue>("post")? {
            LuaValue::Nil => None,
            LuaValue::Table(list) => Some(
              list
                .sequence_values::<LuaValue>()
                .map(|v| v.and_then(parse_tool))
                .collect::<LuaResult<Vec<_>>>()?,
            ),
            _ => return Err(LuaError::external("sass post must be a list of tools")),
          },
        },
        None => StepDecl::Sass {
          dir: SASS_DIR.to_string(),
          include: Vec::new(),
          tool: None,
          post: None,
        },
      };
      s.borrow_mut().push(decl);
      Ok(())
    })?,
  )?;

  let s = steps.clone();
  assets.set(
    "js",
    lua.create_function(move |_, (out, files, opts): (String, LuaValue, Option<LuaTable>)| {
      let files = string_list(files, "js files")?;
      let minifier = match opts {
        Some(t) => match t.get::<LuaValue>("minify")? {
          LuaValue::Nil | LuaValue::Boolean(true) => None,
          LuaValue::Boolean(false) => Some(None),
          other => Some(Some(parse_tool(other)?)),
        },
        None => None,
      };
      s.borrow_mut().push(StepDecl::Js { out, files, minifier });
      Ok(())
    })?,
  )?;

  let s = steps.clone();
  assets.set(
    "templates",
    lua.create_function(move |_, opts: Option<LuaTable>| {
      let (dir, tool) = match opts {
        Some(t) => (
          t.get::<Option<String>>("dir")?.unwrap_or_else(|| TEMPLATES_DIR.to_string()),
          parse_opt_tool(t.get("tool")?)?,
        ),
        None => (TEMPLATES_DIR.to_string(), None),
      };
      s.borrow_mut().push(StepDecl::Templates { dir, tool });
      Ok(())
    })?,
  )?;

  let s = steps;
  assets.set(
    "exec",
    lua.create_function(move |_, opts: LuaTable| {
      let name: String = opts
        .get("name")
        .map_err(|_| LuaError::external("exec requires 'name' field"))?;
      let program: String = opts
        .get("cmd")
        .map_err(|_| LuaError::external("exec requires 'cmd' field"))?;
      let args = string_list(opts.get("args")?, "exec args")?;

      let mut outputs = BTreeMap::new();
      if let Some(table) = opts.get::<Option<LuaTable>>("outputs")? {
        for pair in table.pairs::<String, String>() {
          let (logical, path) = pair?;
          outputs.insert(logical, PathBuf::from(path));
        }
      }

      s.borrow_mut().push(StepDecl::Exec {
        name,
        program,
        args,
        outputs,
      });
      Ok(())
    })?,
  )?;

  lua.globals().set("assets", assets)?;
  Ok(())
}

/// A tool is either a program name or `{ program, arg... }`.
fn parse_tool(value: LuaValue) -> LuaResult<ToolSpec> {
  match value {
    LuaValue::String(s) => Ok(ToolSpec::new(s.to_str()?.to_string(), Vec::<String>::new())),
    LuaValue::Table(t) => {
      let mut parts = t.sequence_values::<String>().collect::<LuaResult<Vec<_>>>()?.into_iter();
      let program = parts
        .next()
        .ok_or_else(|| LuaError::external("tool table must start with the program"))?;
      Ok(ToolSpec::new(program, parts))
    }
    _ => Err(LuaError::external("tool must be a string or a list")),
  }
}

fn parse_opt_tool(value: LuaValue) -> LuaResult<Option<ToolSpec>> {
  match value {
    LuaValue::Nil => Ok(None),
    v => parse_tool(v).map(Some),
  }
}

fn string_list(value: LuaValue, what: &str) -> LuaResult<Vec<String>> {
  match value {
    LuaValue::Nil => Ok(Vec::new()),
    LuaValue::Table(t) => t.sequence_values::<String>().collect(),
    _ => Err(LuaError::external(format!("{} must be a list of strings", what))),
  }
}
