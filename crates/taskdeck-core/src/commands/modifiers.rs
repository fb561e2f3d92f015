use anyhow::Context;
use chrono::{
  DateTime,
  Utc
};
use chrono_tz::Tz;
use tracing::{
  instrument,
  trace
};

use crate::datetime::parse_date_expr;
use crate::task::{
  NewTask,
  Priority,
  TaskPatch
};

/// A `key:value` token on the command
/// line. An empty value clears the
/// field where that makes sense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mod {
  Priority(Priority),
  Due(Option<DateTime<Utc>>),
  Category(Option<String>),
  Description(Option<String>)
}

/// Splits arguments into title words
/// and modifiers. Everything after a
/// bare `--` is taken literally.
#[instrument(skip(args, now, tz))]
pub fn parse_title_and_mods(
  args: &[String],
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<(String, Vec<Mod>)>
{
  let mut title_parts = Vec::new();
  let mut mods = Vec::new();

  let mut literal = false;
  for arg in args {
    if !literal && arg == "--" {
      literal = true;
      continue;
    }

    if !literal
      && let Some(one_mod) =
        parse_one_mod(arg, now, tz)?
    {
      trace!(?one_mod, "parsed modifier");
      mods.push(one_mod);
      continue;
    }

    title_parts.push(arg.as_str());
  }

  Ok((title_parts.join(" "), mods))
}

fn parse_one_mod(
  tok: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<Option<Mod>> {
  let Some((key, value)) = tok
    .split_once(':')
    .or_else(|| tok.split_once('='))
  else {
    return Ok(None);
  };

  let value = value.trim();
  let optional = || {
    (!value.is_empty())
      .then(|| value.to_string())
  };

  match key.to_ascii_lowercase().as_str()
  {
    | "pri" | "priority" => {
      let priority = value
        .parse::<Priority>()?;
      Ok(Some(Mod::Priority(priority)))
    }
    | "due" => {
      if value.is_empty() {
        return Ok(Some(Mod::Due(None)));
      }
      let due =
        parse_date_expr(value, now, tz)
          .with_context(|| {
            format!(
              "invalid due date: \
               {value}"
            )
          })?;
      Ok(Some(Mod::Due(Some(due))))
    }
    | "cat" | "category" => {
      Ok(Some(Mod::Category(optional())))
    }
    | "desc" | "description" => {
      Ok(Some(Mod::Description(
        optional()
      )))
    }
    | _ => Ok(None)
  }
}

pub(super) fn new_task_from(
  title: String,
  mods: Vec<Mod>
) -> NewTask {
  let mut new_task = NewTask::titled(title);
  for one_mod in mods {
    match one_mod {
      | Mod::Priority(priority) => {
        new_task.priority =
          Some(priority);
      }
      | Mod::Due(due) => {
        new_task.due_date = due;
      }
      | Mod::Category(category) => {
        new_task.category = category;
      }
      | Mod::Description(text) => {
        new_task.description = text;
      }
    }
  }
  new_task
}

pub(super) fn patch_from(
  title: Option<String>,
  mods: Vec<Mod>
) -> TaskPatch {
  let mut patch = TaskPatch {
    title,
    ..TaskPatch::default()
  };
  for one_mod in mods {
    match one_mod {
      | Mod::Priority(priority) => {
        patch.priority = Some(priority);
      }
      | Mod::Due(due) => {
        patch.due_date = Some(due);
      }
      | Mod::Category(category) => {
        patch.category = Some(category);
      }
      | Mod::Description(text) => {
        patch.description = Some(text);
      }
    }
  }
  patch
}
