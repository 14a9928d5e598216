use anyhow::Context;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window,
};

pub enum WindowEvents<'a> {
    Resized {
        width: u32,
        height: u32,
    },
    Keyboard {
        state: ElementState,
        virtual_keycode: &'a VirtualKeyCode,
    },
    MouseMoved {
        position: PhysicalPosition<f64>,
    },
    MouseInput {
        state: ElementState,
        button: &'a MouseButton,
    },
    Draw,
}

/// What the event callback wants the loop to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Window {
    event_loop: EventLoop<()>,
    pub window: window::Window,
}

impl Window {
    pub fn new(title: &str, width: u32, height: u32) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new();
        let window = window::WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .build(&event_loop)
            .context("Couldn't create window")?;

        Ok(Self { event_loop, window })
    }

    pub fn run(self, mut callback: impl 'static + FnMut(WindowEvents) -> Flow) -> ! {
        self.event_loop.run(move |event, _, control_flow| {
            let flow = match event {
                Event::WindowEvent {
                    ref event,
                    window_id,
                } if window_id == self.window.id() => {
                    // Handle window events (like resizing, or key inputs)
                    // This is stuff from `winit` -- see their docs for more info
                    match event {
                        WindowEvent::CloseRequested
                        | WindowEvent::KeyboardInput {
                            input:
                                KeyboardInput {
                                    state: ElementState::Pressed,
                                    virtual_keycode: Some(VirtualKeyCode::Escape),
                                    ..
                                },
                            ..
                        } => Flow::Exit,
                        WindowEvent::KeyboardInput {
                            input:
                                KeyboardInput {
                                    state,
                                    virtual_keycode: Some(keycode),
                                    ..
                                },
                            ..
                        } => callback(WindowEvents::Keyboard {
                            state: *state,
                            virtual_keycode: keycode,
                        }),
                        WindowEvent::CursorMoved { position, .. } => {
                            callback(WindowEvents::MouseMoved {
                                position: *position,
                            })
                        }
                        WindowEvent::MouseInput { state, button, .. } => {
                            callback(WindowEvents::MouseInput {
                                state: *state,
                                button,
                            })
                        }
                        WindowEvent::Resized(physical_size) => callback(WindowEvents::Resized {
                            width: physical_size.width,
                            height: physical_size.height,
                        }),
                        WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                            // new_inner_size is &&mut so w have to dereference it twice
                            callback(WindowEvents::Resized {
                                width: new_inner_size.width,
                                height: new_inner_size.height,
                            })
                        }
                        _ => Flow::Continue,
                    }
                }
                Event::RedrawRequested(window_id) if window_id == self.window.id() => {
                    callback(WindowEvents::Draw)
                }
                Event::RedrawEventsCleared => {
                    // RedrawRequested will only trigger once, unless we manually
                    // request it.
                    self.window.request_redraw();
                    Flow::Continue
                }
                _ => Flow::Continue,
            };

            if flow == Flow::Exit {
                *control_flow = ControlFlow::Exit;
            }
        })
    }
}
