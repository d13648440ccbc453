use iocraft::prelude::*;
use tokio::sync::watch;

use crate::format::format_file_size;
use crate::rest_types::FileEntry;

#[derive(Default, Props)]
pub struct ProgressBarProps {
    pub title: String,
    pub progress: Option<watch::Receiver<f32>>,
}

#[component]
pub fn ProgressBar(props: &ProgressBarProps, mut hooks: Hooks) -> impl Into<AnyElement<'static>> {
    let mut percent = hooks.use_state(|| 0f32);
    let receiver = props.progress.clone();

    hooks.use_future(async move {
        let Some(mut receiver) = receiver else {
            return;
        };
        loop {
            let value = *receiver.borrow_and_update();
            percent.set(value.clamp(0.0, 100.0));
            if receiver.changed().await.is_err() {
                break;
            }
        }
    });

    element! {
        View(flex_direction: FlexDirection::Column) {
            Text(content: format!("{} {:>3.0}%", props.title, percent.get()))
            View(border_style: BorderStyle::Round, border_color: Color::Blue, width: 60) {
                View(width: Percent(percent.get()), height: 1, background_color: Color::Blue)
            }
        }
    }
}

#[derive(Default, Props)]
pub struct SuccessMessageProps {
    pub message: String,
}

#[component]
pub fn SuccessMessage(props: &SuccessMessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(content: "✔ ", color: Color::Green)
            Text(content: &props.message, weight: Weight::Bold)
        }
    }
}

#[derive(Default, Props)]
pub struct ErrorMessageProps {
    pub message: String,
}

#[component]
pub fn ErrorMessage(props: &ErrorMessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(content: "✖ ", color: Color::Red)
            Text(content: &props.message, color: Color::Red)
        }
    }
}

#[derive(Default, Props)]
pub struct FilesListProps {
    pub files: Vec<FileEntry>,
}

#[component]
pub fn FilesList(props: &FilesListProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            #(props.files.iter().enumerate().map(|(index, file)| {
                let name = file
                    .pathname
                    .rsplit('/')
                    .next()
                    .unwrap_or(file.pathname.as_str())
                    .to_string();
                element! {
                    View(flex_direction: FlexDirection::Column, margin_bottom: 1) {
                        Text(content: format!("{}. {}", index + 1, name), color: Color::Cyan)
                        Text(content: format!("   Size: {}", format_file_size(file.size)), color: Color::DarkGrey)
                        Text(content: format!("   Uploaded: {}", file.uploaded_at), color: Color::DarkGrey)
                        Text(content: format!("   URL: {}", file.url), color: Color::DarkGrey)
                    }
                }
            }))
        }
    }
}
