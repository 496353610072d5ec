use std::error::Error;

use chrono::NaiveDate;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::model::{AppConfig, Drawing, DrawingStatus, NewDrawing, NewUser, PermissionSet, UserAccount};
use crate::ops::auth::hash_password;
use crate::ops::pages::drawing_search_fields;
use crate::ops::user_admin::{self, UserForm};
use crate::store::Store;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(command: Commands, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let store = Store::open_sqlite(&config.database.path)?;
    let iterations = config.auth.pbkdf2_iterations;
    match command {
        Commands::Init(args) => cmd_init(&store, config, args),
        Commands::User(cmd) => match cmd.action {
            UserAction::List { json } => cmd_user_list(&store, json),
            UserAction::Add(args) => cmd_user_add(&store, args, iterations),
            UserAction::Passwd { name, password } => {
                cmd_user_passwd(&store, &name, password, iterations)
            }
            UserAction::Delete { name } => cmd_user_delete(&store, &name),
        },
        Commands::Drawing(cmd) => match cmd.action {
            DrawingAction::List(args) => cmd_drawing_list(&store, args),
            DrawingAction::Add(args) => cmd_drawing_add(&store, args),
        },
    }
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Opening the store already created the tables
fn cmd_init(store: &Store, config: &AppConfig, args: InitArgs) -> Result<(), Box<dyn Error>> {
    println!("Database ready at {}", config.database.path.display());
    let (Some(admin), Some(password)) = (args.admin, args.password) else {
        return Ok(());
    };
    let admin = admin.trim().to_string();
    if admin.is_empty() || password.trim().is_empty() {
        return Err("administrator name and password must not be empty".into());
    }
    if store.users.exists(&admin, None)? {
        return Err(format!("user '{}' already exists", admin).into());
    }
    store.users.create(&NewUser {
        username: admin.clone(),
        password_hash: hash_password(&password, config.auth.pbkdf2_iterations),
        department: String::new(),
        permissions: PermissionSet::all(),
    })?;
    tracing::info!(user = %admin, "administrator created");
    println!("Created administrator '{}'", admin);
    Ok(())
}

// ---------------------------------------------------------------------------
// User commands
// ---------------------------------------------------------------------------

fn find_user(store: &Store, name: &str) -> Result<UserAccount, Box<dyn Error>> {
    store
        .users
        .list()?
        .into_iter()
        .find(|u| u.username == name)
        .ok_or_else(|| format!("no user named '{}'", name).into())
}

fn cmd_user_list(store: &Store, json: bool) -> Result<(), Box<dyn Error>> {
    let users = store.users.list()?;
    if json {
        let out: Vec<UserJson> = users.iter().map(user_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_user_table(&users) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_user_add(store: &Store, args: UserAddArgs, iterations: u32) -> Result<(), Box<dyn Error>> {
    let form = UserForm {
        id: None,
        username: args.name,
        password: args.password,
        department: args.department,
        permissions: args.perms.into_iter().collect(),
    };
    let id = user_admin::save_user(store.users.as_ref(), &form, iterations)?;
    println!("Added user '{}' (id {})", form.username.trim(), id);
    Ok(())
}

fn cmd_user_passwd(
    store: &Store,
    name: &str,
    password: String,
    iterations: u32,
) -> Result<(), Box<dyn Error>> {
    if password.trim().is_empty() {
        return Err("password must not be empty".into());
    }
    let account = find_user(store, name)?;
    let mut form = UserForm::for_edit(&account);
    form.password = password;
    user_admin::save_user(store.users.as_ref(), &form, iterations)?;
    println!("Password updated for '{}'", name);
    Ok(())
}

fn cmd_user_delete(store: &Store, name: &str) -> Result<(), Box<dyn Error>> {
    let account = find_user(store, name)?;
    // No signed-in user on the command line, so only the outstanding-request rule applies
    user_admin::delete_user(store, "", &account)?;
    println!("Deleted user '{}'", name);
    Ok(())
}

// ---------------------------------------------------------------------------
// Drawing commands
// ---------------------------------------------------------------------------

fn drawing_matches(drawing: &Drawing, needle: &str) -> bool {
    drawing_search_fields(drawing)
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn cmd_drawing_list(store: &Store, args: DrawingListArgs) -> Result<(), Box<dyn Error>> {
    let mut drawings = match args.status.as_deref() {
        Some(s) => {
            let status: DrawingStatus = s.parse()?;
            store.drawings.list_by_status(&[status])?
        }
        None => store.drawings.list_all()?,
    };
    if let Some(search) = args.search.as_deref() {
        let needle = search.trim().to_lowercase();
        drawings.retain(|d| drawing_matches(d, &needle));
    }

    if args.json {
        let out: Vec<DrawingJson> = drawings.iter().map(drawing_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if drawings.is_empty() {
        println!("No drawings");
    } else {
        for line in format_drawing_table(&drawings) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_drawing_add(store: &Store, args: DrawingAddArgs) -> Result<(), Box<dyn Error>> {
    let number = args.number.trim().to_string();
    if number.is_empty() {
        return Err("drawing number must not be empty".into());
    }
    let approved_on = args
        .approved_on
        .as_deref()
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| format!("invalid --approved-on '{}': {}", s, e))
        })
        .transpose()?;
    let drawing = store.drawings.insert(&NewDrawing {
        number,
        title: args.title.trim().to_string(),
        revision: args.revision.trim().to_string(),
        approved_on,
    })?;
    tracing::info!(drawing = %drawing.number, id = drawing.id, "drawing added");
    println!("Added drawing {} (id {})", drawing.number, drawing.id);
    Ok(())
}
