/// Shared Vulkan contexts
///
/// - `InstanceContext`: entry, instance and debug messenger. Shared by the
///   backend and every device created from it.
/// - `GpuContext`: logical device, allocator, direct queue and the presentation
///   semaphores handed between swapchain and queue. Shared by every object the
///   device creates.
///
/// Both are held through `Arc`, so the last owner destroys the Vulkan object:
/// resources → device → instance, whatever order the caller drops things in.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Vulkan instance shared by the backend and its devices
pub struct InstanceContext {
    /// Vulkan entry (needed for surface creation)
    pub entry: ash::Entry,

    /// Vulkan instance
    pub instance: ash::Instance,

    /// Surface loader
    pub surface_loader: ash::khr::surface::Instance,

    /// Debug utils loader (for validation layers)
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        unsafe {
            #[cfg(feature = "vulkan-validation")]
            {
                // Stop routing messages before the messenger goes away
                crate::debug::cleanup_debug_config();

                if let (Some(debug_utils), Some(messenger)) =
                    (&self.debug_utils_loader, self.debug_messenger.take())
                {
                    debug_utils.destroy_debug_utils_messenger(messenger, None);
                }
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Semaphores linking an acquired swap image to the next submission and present
///
/// Acquire stores `wait` (image available) and `signal` (render finished). The
/// next queue submission consumes both and moves `signal` to `present_wait`.
#[derive(Debug, Default)]
pub(crate) struct PresentSync {
    pub wait: Option<vk::Semaphore>,
    pub signal: Option<vk::Semaphore>,
    pub present_wait: Option<vk::Semaphore>,
}

impl PresentSync {
    /// Semaphore the present must wait on: the render-finished one if a
    /// submission consumed the acquire, the acquire semaphore otherwise
    pub fn take_for_present(&mut self) -> Option<vk::Semaphore> {
        let semaphore = self.present_wait.take().or_else(|| self.wait.take());
        self.wait = None;
        self.signal = None;
        semaphore
    }
}

/// Shared GPU context for all Vulkan objects of one device
pub struct GpuContext {
    /// Instance this device was created from
    pub instance: Arc<InstanceContext>,

    /// Physical device
    pub physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Direct (graphics) queue
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Host access to the queue must be externally synchronized
    queue_lock: Mutex<()>,

    /// Submissions and presents enqueued so far
    work_serial: AtomicU64,

    pub(crate) present_sync: Mutex<PresentSync>,
}

impl GpuContext {
    pub fn new(
        instance: Arc<InstanceContext>,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
    ) -> Self {
        Self {
            instance,
            physical_device,
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            graphics_queue_family,
            queue_lock: Mutex::new(()),
            work_serial: AtomicU64::new(0),
            present_sync: Mutex::new(PresentSync::default()),
        }
    }

    /// Lock the queue for a submit or present
    pub(crate) fn lock_queue(&self) -> MutexGuard<'_, ()> {
        self.queue_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn lock_present_sync(&self) -> MutexGuard<'_, PresentSync> {
        self.present_sync
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn lock_allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn bump_work_serial(&self) {
        self.work_serial.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn work_serial(&self) -> u64 {
        self.work_serial.load(Ordering::Acquire)
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // Every object holding this context is gone; only in-flight work remains
            self.device.device_wait_idle().ok();

            // Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
        }
        // `instance` is released after this, possibly destroying the instance
    }
}
