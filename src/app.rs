use std::rc::Rc;

use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos::web_sys::{File, HtmlInputElement};
use wasm_bindgen::JsValue;

use crate::chat::{ChatSessionController, DisplayedMessage};
use crate::config::ClientConfig;
use crate::gateway::{HttpGateway, RemoteGateway};
use crate::model::{DocumentSummary, Sender, UploadFile};
use crate::notify::{BrowserNotifier, Notifier};
use crate::preview::DomPreview;
use crate::settings::SettingsController;
use crate::store::UiStateStore;
use crate::tree::{NodeKey, TreeController, VersionRow};

type TreeHandle = StoredValue<Rc<TreeController>, LocalStorage>;
type ChatHandle = StoredValue<Rc<ChatSessionController<DomPreview>>, LocalStorage>;
type SettingsHandle = StoredValue<Rc<SettingsController>, LocalStorage>;

async fn read_upload(file: File) -> Result<UploadFile, JsValue> {
    let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer()).await?;
    Ok(UploadFile {
        name: file.name(),
        bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
    })
}

fn toggle_node(tree: TreeHandle, node: NodeKey) {
    let tree = tree.get_value();
    spawn_local(async move {
        let _ = tree.toggle(node).await;
    });
}

fn upload_from_input(tree: TreeHandle, ev: ev::Event, project_id: String, doc_base_id: Option<String>) {
    let input: HtmlInputElement = event_target(&ev);
    let Some(file) = input.files().and_then(|files| files.get(0)) else {
        return;
    };
    input.set_value("");
    let tree = tree.get_value();
    spawn_local(async move {
        match read_upload(file).await {
            Ok(upload) => {
                let _ = tree
                    .upload_document(&project_id, upload, doc_base_id.as_deref())
                    .await;
            }
            Err(err) => log::warn!("could not read selected file: {err:?}"),
        }
    });
}

fn version_rows(
    tree: TreeHandle,
    chat: ChatHandle,
    project_id: &str,
    doc_base_id: &str,
    rows: Vec<VersionRow>,
    current_version: Option<String>,
) -> Vec<AnyView> {
    rows.into_iter().map(|row| {
        let is_current = current_version.as_deref() == Some(row.version_id.as_str());
        let select_project = project_id.to_string();
        let select_doc = doc_base_id.to_string();
        let select_version = row.version_id.clone();
        let delete_doc = doc_base_id.to_string();
        let delete_version = row.version_id.clone();
        let delete_button = row.deletable.then(|| view! {
            <button
                class="delete-version-btn"
                style="background: transparent; border: none; color: #dc2626; cursor: pointer; font-size: 0.8rem;"
                on:click=move |e: ev::MouseEvent| {
                    e.stop_propagation();
                    let tree = tree.get_value();
                    let doc = delete_doc.clone();
                    let version = delete_version.clone();
                    spawn_local(async move {
                        let _ = tree.delete_version(&doc, &version).await;
                    });
                }
            >
                "Delete"
            </button>
        });

        let row_style = format!(
            "display: flex; align-items: center; justify-content: space-between; padding: 0.35rem 0.5rem; cursor: pointer; border-radius: var(--radius-md); font-size: 0.85rem; {}",
            if is_current { "background: var(--accent-color); color: white;" } else { "" }
        );

        view! {
            <div
                class="version-item"
                style=row_style
                on:click=move |_| {
                    tree.with_value(|t| t.focus_version(&select_project, &select_doc));
                    let chat = chat.get_value();
                    let version = select_version.clone();
                    spawn_local(async move {
                        let _ = chat.select_version(&version).await;
                    });
                }
            >
                <div>
                    <span>{row.label.clone()}</span>
                    {row.is_latest.then(|| view! { <span style="margin-left: 0.5rem; font-weight: 600;">"(latest)"</span> })}
                    <span style="margin-left: 0.5rem; opacity: 0.7;">{row.uploaded.clone()}</span>
                    <span style="margin-left: 0.5rem; opacity: 0.7;">{row.status.label()}</span>
                </div>
                {delete_button}
            </div>
        }.into_any()
    }).collect()
}

fn document_rows(
    tree: TreeHandle,
    chat: ChatHandle,
    project_id: &str,
    documents: Vec<DocumentSummary>,
    current_version: Option<String>,
) -> Vec<AnyView> {
    documents.into_iter().map(|doc| {
        let node = NodeKey::Document(doc.doc_base_id.clone());
        let (expanded, rows) = tree.with_value(|t| (t.is_expanded(&node), t.version_rows(&doc.doc_base_id)));
        let versions = expanded.then(|| {
            version_rows(tree, chat, project_id, &doc.doc_base_id, rows, current_version.clone())
        });
        let upload_project = project_id.to_string();
        let upload_doc = doc.doc_base_id.clone();
        let latest = doc.latest_version_number.map(|n| format!("v{n}"));

        view! {
            <div class="document-item" style="margin: 0.25rem 0 0.25rem 0.75rem;">
                <div style="display: flex; align-items: center; justify-content: space-between; padding: 0.35rem 0.5rem; cursor: pointer; border-radius: var(--radius-md);"
                    on:click=move |_| toggle_node(tree, node.clone())
                >
                    <div>
                        <span style="font-weight: 500;">{doc.filename.clone()}</span>
                        {latest.map(|label| view! { <span style="margin-left: 0.5rem; color: var(--text-muted); font-size: 0.85rem;">{label}</span> })}
                        {doc.status.map(|status| view! { <span style="margin-left: 0.5rem; color: var(--text-muted); font-size: 0.85rem;">{status.label()}</span> })}
                    </div>
                </div>
                <label style="margin-left: 0.5rem; font-size: 0.8rem; color: var(--accent-color); cursor: pointer;">
                    "Upload new version"
                    <input type="file" accept=".docx" style="display: none;"
                        on:change=move |e| upload_from_input(tree, e, upload_project.clone(), Some(upload_doc.clone()))
                    />
                </label>
                <div class="versions-container" style="margin-left: 0.75rem;">{versions}</div>
            </div>
        }.into_any()
    }).collect()
}

fn project_rows(tree: TreeHandle, chat: ChatHandle, current_version: Option<String>) -> Vec<AnyView> {
    let rows = tree.with_value(|t| t.visible_projects());
    rows.into_iter().map(|row| {
        let project_id = row.project.project_id.clone();
        let node = NodeKey::Project(project_id.clone());
        let documents = row.expanded.then(|| {
            let docs = tree.with_value(|t| t.documents(&project_id));
            document_rows(tree, chat, &project_id, docs, current_version.clone())
        });
        let upload_project = project_id.clone();

        view! {
            <div class="project-item" style="margin-bottom: 0.5rem; padding: 0.5rem 0.75rem; border: 1px solid var(--border-color); border-radius: var(--radius-md);">
                <div style="cursor: pointer;" on:click=move |_| toggle_node(tree, node.clone())>
                    <div style="font-weight: 600;">{row.project.project_id.clone()}</div>
                    {row.project.project_name.clone().map(|name| view! { <div style="font-size: 0.85rem; color: var(--text-muted);">{name}</div> })}
                </div>
                <label style="font-size: 0.8rem; color: var(--accent-color); cursor: pointer;">
                    "Upload document"
                    <input type="file" accept=".docx" style="display: none;"
                        on:change=move |e| upload_from_input(tree, e, upload_project.clone(), None)
                    />
                </label>
                <div class="documents-container">{documents}</div>
            </div>
        }.into_any()
    }).collect()
}

fn message_view(chat: ChatHandle, index: usize, message: DisplayedMessage) -> AnyView {
    let is_system = message.view.sender == Sender::System;
    let markers = message.view.citations.iter().map(|marker| {
        let number = marker.number;
        view! {
            <a href="#" class="source-reference" title=marker.block_id.clone()
                style="margin-right: 0.35rem; color: var(--accent-color);"
                on:click=move |e: ev::MouseEvent| {
                    e.prevent_default();
                    chat.with_value(|c| c.activate_citation(index, number));
                }
            >
                {format!("[{number}]")}
            </a>
        }
    }).collect::<Vec<_>>();
    let has_markers = !markers.is_empty();
    let (row_style, bubble_style) = if is_system {
        ("margin-bottom: 1rem; display: flex; justify-content: flex-start;", "padding: 0.75rem; border-radius: var(--radius-md); background: var(--bg-secondary);")
    } else {
        ("margin-bottom: 1rem; display: flex; justify-content: flex-end;", "padding: 0.75rem; border-radius: var(--radius-md); background: var(--accent-color); color: white;")
    };

    view! {
        <div style=row_style>
            <div style="max-width: 80%;">
                <div
                    style=bubble_style
                    inner_html=message.view.body_html.clone()
                ></div>
                {has_markers.then(|| view! {
                    <div style="margin-top: 0.35rem; font-size: 0.85rem; color: var(--text-muted);">"Sources: " {markers}</div>
                })}
                <div style="font-size: 0.75rem; color: var(--text-muted); margin-top: 0.2rem;">{message.view.time_label.clone()}</div>
            </div>
        </div>
    }.into_any()
}

#[component]
pub fn App() -> impl IntoView {
    let config = ClientConfig::from_window();
    let store = UiStateStore::new();
    let gateway: Rc<dyn RemoteGateway> = Rc::new(HttpGateway::new(&config.api_base_url));
    let notifier: Rc<dyn Notifier> = Rc::new(BrowserNotifier);

    let tree: TreeHandle = StoredValue::new_local(Rc::new(TreeController::new(
        gateway.clone(),
        notifier.clone(),
        store.clone(),
    )));
    let chat: ChatHandle = StoredValue::new_local(Rc::new(ChatSessionController::new(
        gateway.clone(),
        notifier.clone(),
        store.clone(),
        DomPreview::new(config.highlight_class.clone(), config.scroll_mode),
    )));
    let settings: SettingsHandle = StoredValue::new_local(Rc::new(SettingsController::new(
        gateway,
        notifier,
        store.clone(),
    )));
    let ui_state = StoredValue::new_local(store.clone());

    // Bumped on every store change; views re-read controller state when it moves.
    let (revision, set_revision) = signal(0u64);
    store.subscribe(move |rev| set_revision.set(rev));

    let (show_settings, set_show_settings) = signal(false);
    let (api_key_input, set_api_key_input) = signal(String::new());

    let open_settings = move || {
        let settings = settings.get_value();
        spawn_local(async move {
            if let Ok(key) = settings.load_api_key().await {
                set_api_key_input.set(key.unwrap_or_default());
                set_show_settings.set(true);
            }
        });
    };

    let prompt_for_key = config.prompt_for_api_key;
    Effect::new(move |_| {
        let tree = tree.get_value();
        let settings = settings.get_value();
        spawn_local(async move {
            let _ = tree.load_projects().await;
            if prompt_for_key && !settings.has_api_key().await {
                set_api_key_input.set(String::new());
                set_show_settings.set(true);
            }
        });
    });

    let create_project = move || {
        let Ok(Some(project_id)) = window().prompt_with_message("Project id") else {
            return;
        };
        let project_name = window()
            .prompt_with_message("Project name (optional)")
            .ok()
            .flatten()
            .unwrap_or_default();
        let tree = tree.get_value();
        spawn_local(async move {
            let _ = tree.create_project(&project_id, &project_name).await;
        });
    };

    let save_api_key = move || {
        let settings = settings.get_value();
        let key = api_key_input.get_untracked();
        spawn_local(async move {
            if settings.save_api_key(&key).await.is_ok() {
                set_show_settings.set(false);
            }
        });
    };

    let send_question = move || {
        let chat = chat.get_value();
        let text = chat.draft();
        spawn_local(async move {
            let _ = chat.send_question(&text).await;
        });
    };

    let selection_label = move || {
        revision.track();
        let state = ui_state.with_value(|s| s.snapshot());
        match (state.current_project_id, state.current_doc_base_id, state.current_version_id) {
            (Some(project), Some(doc), Some(version)) => format!("{project} / document {doc} / version {version}"),
            (_, _, Some(version)) => format!("version {version}"),
            _ => "Select a document version from the sidebar.".to_string(),
        }
    };

    let settings_panel = move || show_settings.get().then(|| view! {
        <div style="position: fixed; inset: 0; background: rgba(0,0,0,0.35); display: flex; align-items: center; justify-content: center; z-index: 20;">
            <div style="background: var(--bg-primary); padding: 2rem; border-radius: var(--radius-md); width: 420px; display: flex; flex-direction: column; gap: 1rem;">
                <h2 style="margin: 0;">"Settings"</h2>
                <label style="font-weight: 600; font-size: 0.9em;">"API Key"</label>
                <input style="padding: 0.5rem; border-radius: 4px; border: 1px solid var(--border-color); background: var(--bg-secondary); color: var(--text-primary);"
                    type="text"
                    prop:value=move || api_key_input.get()
                    on:input=move |e| set_api_key_input.set(event_target_value(&e))
                />
                <div style="display: flex; justify-content: flex-end; gap: 0.5rem;">
                    <button on:click=move |_| set_show_settings.set(false)>"Cancel"</button>
                    <button on:click=move |_| save_api_key()>"Save"</button>
                </div>
            </div>
        </div>
    });

    view! {
        <main class="app-layout" style="display: flex; height: 100vh; width: 100vw; background: var(--bg-primary); color: var(--text-primary);">
            <nav class="sidebar" style="width: var(--sidebar-width); border-right: 1px solid var(--border-color); display: flex; flex-direction: column; background: var(--bg-secondary);">
                <div class="sidebar-header" style="height: var(--topbar-height); display: flex; align-items: center; justify-content: space-between; padding: 0 1rem; border-bottom: 1px solid var(--border-color); font-weight: 600; color: var(--accent-color);">
                    <span>"Projects"</span>
                    <div style="display: flex; gap: 0.5rem; align-items: center;">
                        <button
                            on:click=move |_| create_project()
                            style="background: transparent; border: none; font-size: 1.2rem; cursor: pointer; color: var(--text-muted);"
                            title="New project"
                        >
                            "+"
                        </button>
                        <button
                            on:click=move |_| open_settings()
                            style="background: transparent; border: none; font-size: 1.2rem; cursor: pointer; color: var(--text-muted);"
                            title="Settings"
                        >
                            "⚙"
                        </button>
                    </div>
                </div>
                <input
                    type="search"
                    placeholder="Search projects"
                    style="margin: 0.75rem; padding: 0.5rem; border-radius: 4px; border: 1px solid var(--border-color);"
                    on:input=move |e| tree.with_value(|t| t.filter(&event_target_value(&e)))
                />
                <div class="project-list" style="flex: 1; overflow-y: auto; padding: 0 0.5rem 0.75rem;">
                    {move || {
                        revision.track();
                        let current = ui_state.with_value(|s| s.current_version_id());
                        project_rows(tree, chat, current)
                    }}
                </div>
            </nav>
            <section class="document-pane" style="flex: 1; display: flex; flex-direction: column; border-right: 1px solid var(--border-color);">
                <header class="topbar" style="height: var(--topbar-height); border-bottom: 1px solid var(--border-color); display: flex; align-items: center; padding: 0 1.5rem; color: var(--text-muted); font-size: 0.9rem;">
                    {selection_label}
                </header>
                <div id="documentContent" class="document-preview" style="flex: 1; overflow-y: auto; padding: 2rem 3rem;"></div>
            </section>
            <section class="chat-pane" style="width: 40%; display: flex; flex-direction: column;">
                <div class="chat-messages" style="flex: 1; overflow-y: auto; padding: 1rem;">
                    {move || {
                        revision.track();
                        chat.with_value(|c| c.messages())
                            .into_iter()
                            .enumerate()
                            .map(|(index, message)| message_view(chat, index, message))
                            .collect::<Vec<_>>()
                    }}
                </div>
                <div style="display: flex; gap: 0.5rem; padding: 1rem; border-top: 1px solid var(--border-color);">
                    <textarea
                        style="flex: 1; resize: none; padding: 0.5rem; border-radius: 4px; border: 1px solid var(--border-color); font-family: inherit;"
                        rows="3"
                        placeholder="Ask a question about the selected version..."
                        prop:value=move || {
                            revision.track();
                            chat.with_value(|c| c.draft())
                        }
                        on:input=move |e| chat.with_value(|c| c.set_draft(event_target_value(&e)))
                        on:keydown=move |e: ev::KeyboardEvent| {
                            if e.key() == "Enter" && !e.shift_key() {
                                e.prevent_default();
                                send_question();
                            }
                        }
                    ></textarea>
                    <button on:click=move |_| send_question() style="padding: 0 1rem; background: var(--accent-color); color: white; border: none; border-radius: 4px; cursor: pointer;">
                        "Send"
                    </button>
                </div>
            </section>
            {settings_panel}
            {move || {
                revision.track();
                ui_state.with_value(|s| s.is_loading()).then(|| view! {
                    <div class="loading" style="position: fixed; inset: 0; background: rgba(255,255,255,0.5); display: flex; align-items: center; justify-content: center; z-index: 30;">
                        "Loading..."
                    </div>
                })
            }}
        </main>
    }
}
